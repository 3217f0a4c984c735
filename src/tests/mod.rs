mod roi;
